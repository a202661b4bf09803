//! Static file handler handed to strategies.

use std::path::{Path, PathBuf};

use tower_http::services::ServeDir;

use crate::strategies::StrategyDescriptor;

/// Serves the static assets of one strategy from `<static_root>/<strategy>/`.
#[derive(Debug, Clone)]
pub struct StaticHandler {
    root: PathBuf,
}

impl StaticHandler {
    pub fn new(static_root: &Path, descriptor: &StrategyDescriptor) -> Self {
        Self {
            root: static_root.join(descriptor.strategy()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A `ServeDir` rooted at the strategy's asset directory.
    pub fn service(&self) -> ServeDir {
        ServeDir::new(&self.root).append_index_html_on_directories(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpService;
    use crate::strategies::ConnectionKind;

    #[test]
    fn root_is_scoped_to_strategy() {
        let descriptor = StrategyDescriptor::new("echo", ConnectionKind::WebSocket);
        let handler = StaticHandler::new(Path::new("static"), &descriptor);
        assert_eq!(handler.root(), Path::new("static/echo"));
    }

    #[tokio::test]
    async fn serves_files_as_fallback() {
        let static_root = std::env::temp_dir().join(format!("strategy-server-static-{}", std::process::id()));
        let strategy_dir = static_root.join("demo");
        std::fs::create_dir_all(&strategy_dir).unwrap();
        std::fs::write(strategy_dir.join("index.html"), "<h1>demo</h1>").unwrap();

        let descriptor = StrategyDescriptor::new("demo", ConnectionKind::Udp);
        let handler = StaticHandler::new(&static_root, &descriptor);

        let mut http = HttpService::new("127.0.0.1", 0);
        http.fallback_service(handler.service());
        let addr = http.listen().await.unwrap();

        let index = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(index.status(), 200);
        assert_eq!(index.text().await.unwrap(), "<h1>demo</h1>");

        let missing = reqwest::get(format!("http://{}/nope.js", addr)).await.unwrap();
        assert_eq!(missing.status(), 404);

        http.close().await.unwrap();
        let _ = std::fs::remove_dir_all(&static_root);
    }
}
