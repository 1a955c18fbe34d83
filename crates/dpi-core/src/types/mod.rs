mod dns;
mod run;
mod transport;

pub use dns::*;
pub use run::*;
pub use transport::*;
