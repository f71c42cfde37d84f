mod build_branch;
mod build_bus;
mod build_gen;
mod case;
mod connectivity;
mod context;
mod convert;
mod loadnet;
mod lookup;
mod network;
mod objective;
mod options;
mod reduce;
mod select;
mod switches;
mod update;

pub mod debug;
pub mod idx;

pub use build_branch::*;
pub use build_bus::*;
pub use build_gen::*;
pub use case::*;
pub use connectivity::*;
pub use context::*;
pub use convert::*;
pub use loadnet::*;
pub use lookup::*;
pub use network::*;
pub use objective::*;
pub use options::*;
pub use reduce::*;
pub use select::*;
pub use switches::*;
pub use update::*;
