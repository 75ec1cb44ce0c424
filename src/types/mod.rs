pub mod feed;
pub mod price;
pub mod session;
pub mod volatility;
pub mod ws;

pub use feed::*;
pub use price::*;
pub use session::*;
pub use volatility::*;
pub use ws::*;
