//! One stateful [`LineMatcher`](crate::e_linematcher::LineMatcher) per toolchain family.

pub mod cmake;
pub mod diab;
pub mod gcc;
pub mod ghs;
pub mod gnuld;
pub mod iar;
pub mod iwyu;
pub mod msvc;

pub use cmake::CMakeParser;
pub use diab::DiabParser;
pub use gcc::GccParser;
pub use ghs::GhsParser;
pub use gnuld::GnuLdParser;
pub use iar::IarParser;
pub use iwyu::IwyuParser;
pub use msvc::MsvcParser;
