mod bytes;

pub use self::bytes::decode_single_byte;
