//! Window and tab controller core of the QuillPad text editor.

pub mod app;
