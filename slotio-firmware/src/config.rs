//! Board configuration compiled from board.toml

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));
