#[cfg(feature = "backend-mock")]
pub mod mock;

#[cfg(feature = "backend-raw")]
pub mod raw;

#[cfg(feature = "backend-fmf")]
pub mod fmf;
