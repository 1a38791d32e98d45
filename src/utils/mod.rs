pub mod clipboard;
pub mod test_helpers;
