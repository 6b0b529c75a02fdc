mod permission;
mod role;
mod role_assignment;
mod user;
