//! Sea-ORM entity definitions
//!
//! These map our domain models to database tables.

pub mod identity;
pub mod like;
pub mod profile;
pub mod session;
pub mod video;

// Re-export all entities
pub use identity::Entity as Identity;
pub use like::Entity as Like;
pub use profile::Entity as Profile;
pub use session::Entity as Session;
pub use video::Entity as Video;

// Re-export active models for easy access
pub use identity::ActiveModel as IdentityActive;
pub use like::ActiveModel as LikeActive;
pub use profile::ActiveModel as ProfileActive;
pub use session::ActiveModel as SessionActive;
pub use video::ActiveModel as VideoActive;
