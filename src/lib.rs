pub mod build_info;
pub mod cli;
pub mod domain;
pub mod error;
pub mod field;
pub mod fvm;
pub mod initial_conditions;
pub mod io;
pub mod linear;
pub mod mesh;
pub mod par_slice;
pub mod schemes;
pub mod time;
pub mod util;
