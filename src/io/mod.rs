mod byte_stream;

pub use byte_stream::{ByteOrder, ByteStream, FileStream, MemoryStream};
