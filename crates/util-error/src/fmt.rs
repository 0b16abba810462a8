use std::error::Error;
use std::fmt;

/// Render an error and its whole `source()` chain on a single line
///
/// Useful in structured logging, where multi-line reports are unwelcome.
pub trait FmtCompact<'e> {
    type Report: fmt::Display + 'e;

    fn fmt_compact(self) -> Self::Report;
}

pub struct CompactReport<'e, E: ?Sized>(&'e E);

impl<E> fmt::Display for CompactReport<'_, E>
where
    E: Error + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)?;

        let mut source = self.0.source();
        while let Some(err) = source {
            f.write_str(": ")?;
            fmt::Display::fmt(err, f)?;
            source = err.source();
        }

        Ok(())
    }
}

impl<'e, E> FmtCompact<'e> for &'e E
where
    E: Error + ?Sized,
{
    type Report = CompactReport<'e, E>;

    fn fmt_compact(self) -> Self::Report {
        CompactReport(self)
    }
}
