pub mod admin;
pub mod application;
pub mod errors;
pub mod opportunity;
pub mod profile;
pub mod user;

pub use admin::{AdminStats, UserListResponse, UserRecord};
pub use application::{
    Application, ApplicationEnvelope, ApplicationListResponse, ApplicationStatus,
    StatusUpdateRequest,
};
pub use errors::{ErrorResponse, MessageResponse};
pub use opportunity::{
    NewOpportunity, Opportunity, OpportunityEnvelope, OpportunityFilters, OpportunityListResponse,
    OpportunityType, OpportunityUpdate,
};
pub use profile::{Profile, ProfileDetails, ProfileEnvelope, ProfileField, ProfileKind, ProfilePatch};
pub use user::{AuthResponse, Identity, LoginRequest, MeResponse, Registration, Role};
