//! Embedded static resources for dudu.
//!
//! `starter` holds the project written by `dudu new`. Each file carries
//! `__SITE_NAME__` and `__VERSION__` placeholders filled in at write time.

pub mod starter {
    use std::path::{Path, PathBuf};

    use crate::generator::resource;

    /// Variables substituted into every starter file.
    pub struct StarterVars<'a> {
        pub name: &'a str,
        pub version: &'static str,
    }

    impl<'a> StarterVars<'a> {
        pub fn new(name: &'a str) -> Self {
            Self {
                name,
                version: env!("CARGO_PKG_VERSION"),
            }
        }

        fn fill(&self, text: &str) -> String {
            text.replace("__SITE_NAME__", self.name)
                .replace("__VERSION__", self.version)
        }
    }

    /// One file of the starter project.
    pub struct StarterFile {
        /// Directory relative to the project root.
        pub dir: &'static str,
        pub name: &'static str,
        /// Raw text with placeholders.
        pub text: &'static str,
    }

    impl StarterFile {
        /// Location under `root`.
        pub fn path(&self, root: &Path) -> PathBuf {
            root.join(self.dir).join(self.name)
        }

        /// Text with placeholders filled.
        pub fn render(&self, vars: &StarterVars<'_>) -> String {
            vars.fill(self.text)
        }
    }

    /// Files written by `dudu new`; `md/` and `resources/` match the default layout.
    pub const FILES: &[StarterFile] = &[
        StarterFile {
            dir: "md",
            name: "index.md",
            text: include_str!("starter/md/index.md"),
        },
        StarterFile {
            dir: "md",
            name: "style.css",
            text: include_str!("starter/md/style.css"),
        },
        StarterFile {
            dir: "resources",
            name: resource::TEMPLATE,
            text: include_str!("starter/resources/template.html"),
        },
        StarterFile {
            dir: "resources",
            name: resource::NAVBAR,
            text: include_str!("starter/resources/navbar.html"),
        },
        StarterFile {
            dir: "resources",
            name: resource::FOOTER,
            text: include_str!("starter/resources/footer.html"),
        },
        StarterFile {
            dir: "resources",
            name: resource::HIGHLIGHT_THEME,
            text: include_str!("starter/resources/code-highlight.theme"),
        },
        StarterFile {
            dir: "resources",
            name: resource::HOT_RELOAD,
            text: include_str!("starter/resources/hotreload.html"),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::starter::{FILES, StarterVars};
    use crate::actor::messages::RELOAD_PAYLOAD;
    use crate::cli::serve::WS_PATH;

    #[test]
    fn test_starter_vars_applied() {
        let vars = StarterVars::new("garden");
        for file in FILES {
            let text = file.render(&vars);
            assert!(!text.contains("__SITE_NAME__"), "{}", file.name);
            assert!(!text.contains("__VERSION__"), "{}", file.name);
        }
        let index = FILES[0].render(&vars);
        assert!(index.contains("# Welcome to garden"));
    }

    #[test]
    fn test_hotreload_matches_server() {
        let script = FILES
            .iter()
            .find(|file| file.name == "hotreload.html")
            .unwrap()
            .text;
        assert!(script.contains(&format!("fetch(\"/{WS_PATH}\")")));
        assert!(script.contains(&format!("/{WS_PATH}`")));
        assert!(script.contains(&format!("\"{RELOAD_PAYLOAD}\"")));
    }

    #[test]
    fn test_starter_paths() {
        let root = std::path::Path::new("/site");
        let paths: Vec<_> = FILES.iter().map(|file| file.path(root)).collect();
        assert!(paths.contains(&root.join("md/index.md")));
        assert!(paths.contains(&root.join("resources/template.html")));
    }
}
