//! Applying a candidate to the source file.

use std::io;
use std::path::Path;

use tourniquet_facts::SourceSpan;
use tracing::debug;

/// Replaces a span of a source file with new text, in place.
pub trait Transformer {
    fn transform(
        &self,
        file: &Path,
        is_cxx: bool,
        replacement: &str,
        span: &SourceSpan,
    ) -> io::Result<()>;
}

/// Plain-text span replacement.
///
/// Lines and columns are 1-based, columns count bytes, and the end
/// coordinate is inclusive, matching the spans the exporter records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanRewriter;

impl SpanRewriter {
    /// `content` with `span` replaced by `replacement`.
    pub fn rewrite(content: &str, replacement: &str, span: &SourceSpan) -> io::Result<String> {
        let start = byte_offset(content, span.start_line, span.start_column)?;
        let last = byte_offset(content, span.end_line, span.end_column)?;
        if last < start {
            return Err(invalid(format!("span ends before it starts: {span:?}")));
        }
        let end = last + content[last..].chars().next().map_or(0, char::len_utf8);

        let mut out = String::with_capacity(content.len() - (end - start) + replacement.len());
        out.push_str(&content[..start]);
        out.push_str(replacement);
        out.push_str(&content[end..]);
        Ok(out)
    }
}

impl Transformer for SpanRewriter {
    fn transform(
        &self,
        file: &Path,
        _is_cxx: bool,
        replacement: &str,
        span: &SourceSpan,
    ) -> io::Result<()> {
        let content = std::fs::read_to_string(file)?;
        let patched = Self::rewrite(&content, replacement, span)?;
        std::fs::write(file, patched)?;
        debug!(file = %file.display(), ?span, "applied replacement");
        Ok(())
    }
}

/// Byte offset of a 1-based `(line, column)`, which must name an existing byte.
fn byte_offset(content: &str, line: u32, column: u32) -> io::Result<usize> {
    if line == 0 || column == 0 {
        return Err(invalid(format!("{line}:{column} is not 1-based")));
    }
    let mut lines = content.split_inclusive('\n');
    let mut offset = 0;
    for _ in 1..line {
        offset += lines
            .next()
            .ok_or_else(|| invalid(format!("line {line} is past the end of the file")))?
            .len();
    }
    let text = lines
        .next()
        .ok_or_else(|| invalid(format!("line {line} is past the end of the file")))?;
    let text = text.strip_suffix('\n').unwrap_or(text);

    let col = (column - 1) as usize;
    if col >= text.len() || !text.is_char_boundary(col) {
        return Err(invalid(format!("column {column} is outside line {line}")));
    }
    Ok(offset + col)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}
