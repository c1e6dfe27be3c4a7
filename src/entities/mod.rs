pub mod prelude;

pub mod auth_sessions;
pub mod classroom_students;
pub mod classrooms;
pub mod notifications;
pub mod principals;
pub mod profiles;
pub mod role_requests;
pub mod system_activities;
pub mod task_assignments;
pub mod teacher_tasks;
