pub type CmdResult<T> = wpkeeper::Result<(T, i32)>;

pub mod maintain;
