pub mod advertise;
pub mod horn;
pub mod pixels;
pub mod publish;
pub mod remote_link;
pub mod scheduler;
