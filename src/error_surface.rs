/// At most one message: replaced wholesale by each failure, cleared
/// entirely by each success. Kept separate from the displayed markup so an
/// error never blanks a previously valid diagram.
#[derive(Debug, Default)]
pub struct ErrorSurface {
    message: Option<String>,
}

impl ErrorSurface {
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
