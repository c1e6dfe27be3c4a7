pub mod classroom;
pub mod notification;
pub mod principal;
pub mod profile;
pub mod role_request;

pub use classroom::{Assignment, Classroom, Enrollment, NewClassroom, NewTask, Task};
pub use notification::{NewNotification, Notification};
pub use principal::{Credential, Principal};
pub use profile::{NewProfile, Profile, ProfileChanges, ProfileFilter};
pub use role_request::{NewRoleRequest, Review, ReviewDecision, RoleRequest};
