//! クレート内共有ライブラリ

pub mod bus;
