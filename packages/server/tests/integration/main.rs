mod common;

mod admin;
mod records;
