pub mod ext;
pub mod macros;
pub mod status_code;
pub mod types;

// Публичный экспорт типов ошибок и кодов статуса из вложенных модулей,
// чтобы упростить доступ к ним из внешнего кода.
pub use ext::*;
pub use status_code::*;
pub use types::*;

pub type BusResult<T> = Result<T, BusError>;
