use std::path::Path;

use log::warn;

use crate::context::ParseContext;
use crate::err::Result;
use crate::value::Value;

/// A format family handler.
///
/// Implementations are built once (compiling header patterns and element trees up front) and are
/// then shared read-only between worker threads, so they must not keep per-file state.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn version(&self) -> &'static str;

    fn input_media_type(&self) -> &'static str;

    fn output_schema_id(&self) -> &'static str;

    /// Structural check of whether this adapter understands `file`.
    ///
    /// Must be cheap, repeatable and free of side effects; it is not necessarily followed by
    /// [`Adapter::parse`].
    fn accepts(&self, file: &Path) -> bool;

    fn parse(&self, file: &Path, ctx: &mut ParseContext) -> Result<()>;
}

/// Emit the `file` group every adapter starts its output with.
pub fn write_file_info(file: &Path, ctx: &mut ParseContext) -> Result<()> {
    ctx.start("file");
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ctx.value("name", name);
    ctx.value("path", file.to_string_lossy().into_owned());

    let metadata = std::fs::metadata(file)?;
    ctx.value("size", Value::int(metadata.len()));

    match metadata
        .modified()
        .map_err(|e| e.to_string())
        .and_then(|t| jiff::Timestamp::try_from(t).map_err(|e| e.to_string()))
    {
        Ok(modified) => ctx.value("modified", modified.to_string()),
        Err(e) => warn!("no modification time for {}: {}", file.display(), e),
    }
    ctx.end("file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_info_group() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"12345").unwrap();
        tmp.flush().unwrap();

        let mut ctx = ParseContext::new();
        write_file_info(tmp.path(), &mut ctx).unwrap();

        assert_eq!(ctx.get_int("file.size").unwrap(), 5);
        assert!(ctx.get_str("file.modified").is_ok());
        assert_eq!(
            ctx.get_str("file.name").unwrap(),
            tmp.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_missing_file_fails() {
        let mut ctx = ParseContext::new();
        assert!(write_file_info(Path::new("/no/such/file"), &mut ctx).is_err());
    }
}
