mod position_guard;
mod read_ext;
mod utf16;

pub(crate) use self::position_guard::PositionGuard;
pub(crate) use self::read_ext::ReadExt;
