//! # Multi-valued Decision Diagram Engine
//!
//! A canonical, reduced, ordered decision diagram engine generalised from
//! boolean BDDs to arbitrary finite-domain MDDs, with a reliability-analysis
//! layer built on top: probability propagation, Direct Partial Logic
//! Derivatives (DPLD), importance measures, and minimal cut/path vector
//! enumeration.
//!
//! ## Overview
//!
//! A [`Manager`] owns a shared node pool, unique tables and apply cache for
//! one set of variables; [`Diagram`] is a reference-counted handle to one
//! node of that pool — the "function" a combinator returns. Diagrams from
//! different managers can never be mixed; every operation that takes more
//! than one checks this and returns [`error::ManagerError::ForeignHandle`]
//! rather than panicking.
//!
//! ```
//! use teddy_mdd::{Manager, Op};
//!
//! # fn main() -> Result<(), teddy_mdd::ManagerError> {
//! let m = Manager::new_bdd(4, None)?;
//! let x0 = m.variable(0)?;
//! let x1 = m.variable(1)?;
//! let x2 = m.variable(2)?;
//! let x3 = m.variable(3)?;
//! let lhs = m.apply(Op::And, &x0, &x1)?;
//! let rhs = m.apply(Op::And, &x2, &x3)?;
//! let f = m.apply(Op::Or, &lhs, &rhs)?;
//! assert_eq!(m.satisfy_count(&f, 1)?, 7);
//! # Ok(())
//! # }
//! ```
//!
//! ## Multi-valued variables
//!
//! [`Manager::new_fixed`] and [`Manager::new_mixed`] build managers whose
//! variables range over `0..k` for a shared or per-variable `k`; `And`/`Or`
//! generalise to `min`/`max` over the codomain, so the same combinators work
//! for both BDDs and MDDs:
//!
//! ```
//! use teddy_mdd::{Manager, Op};
//!
//! # fn main() -> Result<(), teddy_mdd::ManagerError> {
//! let m = Manager::new_fixed(2, 3, 3, None)?; // two 3-valued variables
//! let x0 = m.variable(0)?;
//! let x1 = m.variable(1)?;
//! let f = m.apply(Op::Or, &x0, &x1)?; // f = max(x0, x1)
//! assert_eq!(m.satisfy_count(&f, 2)?, 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Reliability analysis
//!
//! The [`reliability`] module treats a diagram as a system structure
//! function: [`reliability::calculate_probabilities`] propagates a
//! per-variable [`reliability::ProbabilityTable`] downward to the
//! terminals, and [`reliability::dpld`]/[`reliability::to_dpld_e`] derive
//! the sensitivity of the system to one component's state change, feeding
//! [`reliability::structural_importance`], [`reliability::birnbaum_importance`],
//! [`reliability::fussell_vesely`], and the minimal cut/path vector
//! enumerations [`reliability::mcvs`]/[`reliability::mpvs`].
//!
//! ## PLA files
//!
//! [`pla::from_pla_file`]/[`pla::from_pla_reader`] build a manager and one
//! diagram per output column from a two-level boolean cover; [`pla::to_pla_writer`]
//! writes a cover back out.

pub mod apply;
pub(crate) mod cache;
pub mod config;
pub mod diagram;
pub mod error;
pub mod manager;
pub mod node;
pub mod pla;
pub(crate) mod pool;
pub mod query;
pub mod reliability;
pub(crate) mod unique_table;

pub use apply::{Fold, Op};
pub use config::ManagerConfig;
pub use diagram::Diagram;
pub use error::{ManagerError, PlaError, PlaReadError, PlaWriteError, ReliabilityError};
pub use manager::Manager;
pub use node::{Level, NodeId, Value, VarIndex};
pub use reliability::{DpldPredicate, ProbabilityTable, VarChange};
