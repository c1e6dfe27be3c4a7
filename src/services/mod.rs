pub mod authorizer;
pub mod classroom_service;
pub mod classroom_service_impl;
pub mod credential_store_impl;
pub mod notification_service;
pub mod profile_service;
pub mod profile_service_impl;
pub mod role_request_service;
pub mod role_request_service_impl;
pub mod session_service;
pub mod session_service_impl;

pub use authorizer::{Authorizer, Request};
pub use classroom_service::ClassroomService;
pub use classroom_service_impl::SeaOrmClassroomService;
pub use credential_store_impl::SeaOrmCredentialStore;
pub use notification_service::{NotificationService, Notifier, Subscription};
pub use profile_service::ProfileService;
pub use profile_service_impl::DefaultProfileService;
pub use role_request_service::RoleRequestService;
pub use role_request_service_impl::DefaultRoleRequestService;
pub use session_service::SessionService;
pub use session_service_impl::DefaultSessionService;
