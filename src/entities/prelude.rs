pub use super::auth_sessions::Entity as AuthSessions;
pub use super::classroom_students::Entity as ClassroomStudents;
pub use super::classrooms::Entity as Classrooms;
pub use super::notifications::Entity as Notifications;
pub use super::principals::Entity as Principals;
pub use super::profiles::Entity as Profiles;
pub use super::role_requests::Entity as RoleRequests;
pub use super::system_activities::Entity as SystemActivities;
pub use super::task_assignments::Entity as TaskAssignments;
pub use super::teacher_tasks::Entity as TeacherTasks;
