mod arc;
mod archive;
mod warc;
mod wav;
mod word2;

pub use self::arc::{ArcAdapter, ArcRecord, ArcRecords, FILEDESC_SCHEME};
pub use self::warc::{WarcAdapter, WarcRecord, WarcRecords};
pub use self::wav::{WAV_HEADER, WaveAdapter, WaveChunk};
pub use self::word2::Word2Adapter;
