use super::rewriter::RewrittenItem;

/// Groups consecutive items that share a scope into one nested block.
///
/// Scopes are compared header by header as plain text; two media
/// conditions that differ only in formatting open separate blocks.
#[derive(Debug, Default)]
pub struct CssSerializer {
    blocks: Vec<String>,
    scope: Vec<String>,
    buffer: Vec<String>,
}

impl CssSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: RewrittenItem) {
        if item.is_unscoped() {
            self.flush();
            self.scope.clear();
            self.blocks.push(item.content);
            return;
        }

        if self.scope != item.headers {
            self.flush();
            self.scope = item.headers;
        }
        self.buffer.push(item.content);
    }

    pub fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n\n")
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let mut block = String::new();
        for header in &self.scope {
            block.push_str(header);
            block.push_str(" {\n");
        }
        block.push_str(&self.buffer.join("\n"));
        for _ in &self.scope {
            block.push_str("\n}");
        }

        self.blocks.push(block);
        self.buffer.clear();
    }
}

pub fn serialize(items: impl IntoIterator<Item = RewrittenItem>) -> String {
    let mut serializer = CssSerializer::new();
    for item in items {
        serializer.push(item);
    }
    serializer.finish()
}
