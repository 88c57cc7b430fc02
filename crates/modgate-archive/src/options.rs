use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default)]
pub struct UnpackOptions {
    /// Path segments to strip below the host's export wrapper directory.
    pub skip_depth: usize,
    pub cancel:     Option<CancellationToken>,
}

impl UnpackOptions {
    pub fn skip_depth(mut self, depth: usize) -> Self {
        self.skip_depth = depth;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Segments removed from every entry name: the wrapper plus `skip_depth`.
    pub fn segments_to_strip(&self) -> usize {
        1 + self.skip_depth
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        check(self.cancel.as_ref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PackOptions {
    pub cancel: Option<CancellationToken>,
}

impl PackOptions {
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        check(self.cancel.as_ref())
    }
}

fn check(token: Option<&CancellationToken>) -> Result<()> {
    match token {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}
