// 8.0: swap executor. walks the mega route tree, settles every leg through the
// venue adapters and cross-checks the blended result against the oracle.
// deterministic and event-driven with no external I/O.

mod config;
mod core;
mod forward;
mod results;
mod reverse;

pub use config::{ExecutorConfig, ROUTER_ACCOUNT};
pub use core::SwapExecutor;
pub use results::{Convergence, LegReport, ReverseQuote, SwapParams, SwapResult};
pub use reverse::bisect;
