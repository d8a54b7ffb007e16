/// External tools driven by the targets
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Go toolchain
    Go,
    /// Archiver
    Tar,
    /// Container engine
    Docker,
    /// Linter aggregator
    GoMetaLinter,
    /// Dependency manager
    Dep,
    /// Version control
    Git,
    /// Static file embedder used by `go generate`
    Esc,
}

impl Tool {
    /// Default program name, also the key in the `[tools]` config table
    pub fn name(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Tar => "tar",
            Self::Docker => "docker",
            Self::GoMetaLinter => "gometalinter",
            Self::Dep => "dep",
            Self::Git => "git",
            Self::Esc => "esc",
        }
    }

    /// Where to get the tool when it is missing
    pub fn install_url(&self) -> &'static str {
        match self {
            Self::Go => "https://golang.org/dl/",
            Self::Tar => "https://www.gnu.org/software/tar/",
            Self::Docker => "https://docs.docker.com/install/",
            Self::GoMetaLinter => "https://github.com/alecthomas/gometalinter",
            Self::Dep => "https://github.com/golang/dep",
            Self::Git => "https://git-scm.com/downloads",
            Self::Esc => "https://github.com/mjibson/esc",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
