/// Heart rate variability algorithms operating on RR intervals in milliseconds.
///
/// - `dfa`: Detrended Fluctuation Analysis (DFA).
/// - `nonlinear`: Poincaré plot descriptors.
/// - `time`: time-domain measures and RR interval extraction.
pub mod dfa;
pub mod nonlinear;
pub mod time;
