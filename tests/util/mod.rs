
pub mod cmd;
pub mod work_dir;
