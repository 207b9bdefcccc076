pub mod machine;
pub mod robot;
pub mod system;
pub mod team;
