pub mod inquiry;
pub mod package;
pub mod visit;

pub use inquiry::{Inquiry, InquiryKind, InquiryStatus, NewInquiry};
pub use package::{PackageType, PackageUpdate, TourPackage};
pub use visit::VisitEvent;
