//! The standard site layout.

use std::path::Path;

use swooce_core::{
    BuildContext, ContentEmitter, CopyEmitter, DynamicGlobResolver, FactoryGlobResolver,
    ModuleExport, ModuleRegistry, Producer, SearchRoot, Site,
};

use crate::kinds::{PageKind, PageModule};

const PAGE_KINDS: &[(&str, PageKind)] = &[
    ("html", PageKind::Html),
    ("htm", PageKind::Html),
    ("md", PageKind::Preformatted),
    ("txt", PageKind::Preformatted),
    ("toml", PageKind::Listing),
];

/// Module registry with every standard page kind registered by extension.
pub fn page_modules() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();

    for &(extension, kind) in PAGE_KINDS {
        registry.register_extension(extension, move |_: &BuildContext, module: &Path| {
            Ok(ModuleExport::resolver(PageModule::new(module, kind)))
        });
    }

    registry
}

/// The standard site: page modules under the pages directory, then a
/// verbatim copy of each static directory.
pub fn standard_site(ctx: &BuildContext) -> Site {
    let pages = DynamicGlobResolver::new(
        SearchRoot::Path(ctx.pages_dir().to_path_buf()),
        "**/*",
        page_modules(),
    );
    let mut site =
        Site::new().with_producer(Producer::new("pages", pages, ContentEmitter::new()));

    for dir in ctx.static_dirs() {
        let name = dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("static");
        let files = FactoryGlobResolver::source_files(SearchRoot::Path(dir.clone()), "**/*");
        site = site.with_producer(Producer::new(name, files, CopyEmitter));
    }

    site
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use swooce_core::{BuildError, ContextConfig, PluginFailurePolicy, SiteIndex};

    fn scaffold(root: &Path) -> BuildContext {
        let ctx = BuildContext::new(root, &ContextConfig::default());
        let pages = ctx.pages_dir();
        fs::create_dir_all(pages.join("post")).unwrap();
        fs::write(pages.join("index.html"), "<h1>Home</h1>").unwrap();
        fs::write(pages.join("post/hello.md"), "Hello").unwrap();
        fs::write(
            pages.join("blog.toml"),
            "title = \"Blog\"\npattern = \"post/*.md\"\n",
        )
        .unwrap();
        fs::create_dir_all(&ctx.static_dirs()[0]).unwrap();
        fs::write(ctx.static_dirs()[0].join("logo.png"), [0x89, b'P']).unwrap();
        fs::create_dir_all(&ctx.static_dirs()[1]).unwrap();
        fs::write(ctx.static_dirs()[1].join("robots.txt"), "User-agent: *").unwrap();
        ctx
    }

    #[test]
    fn registers_every_page_kind() {
        assert_eq!(
            page_modules().extensions(),
            vec!["htm", "html", "md", "toml", "txt"]
        );
    }

    #[test]
    fn producers_are_pages_then_static_dirs() {
        let ctx = BuildContext::new("/site", &ContextConfig::default());

        let site = standard_site(&ctx);
        let names: Vec<&str> = site
            .producers()
            .iter()
            .map(|p| p.name())
            .collect();

        assert_eq!(names, vec!["pages", "static", "public"]);
    }

    #[tokio::test]
    async fn indexes_standard_layout() {
        let temp = tempdir().unwrap();
        let ctx = scaffold(temp.path());

        let index = SiteIndex::build(&ctx, &standard_site(&ctx)).await.unwrap();

        let routes: Vec<String> = index.routes().map(|r| r.to_string()).collect();
        assert_eq!(
            routes,
            vec![
                "/blog.toml.html",
                "/index.html.html",
                "/logo.png",
                "/post/hello.md.html",
                "/robots.txt",
            ]
        );
        assert_eq!(index.get("/logo.png").unwrap().producer.name(), "static");
        assert_eq!(index.get("/robots.txt").unwrap().producer.name(), "public");
    }

    #[tokio::test]
    async fn unknown_page_files_follow_plugin_policy() {
        let temp = tempdir().unwrap();
        let ctx = scaffold(temp.path());
        fs::write(ctx.pages_dir().join("diagram.svg"), "<svg/>").unwrap();

        let err = SiteIndex::build(&ctx, &standard_site(&ctx))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ResolverLoad(_)));

        let ctx = ctx.with_plugin_failure_policy(PluginFailurePolicy::Skip);
        let index = SiteIndex::build(&ctx, &standard_site(&ctx)).await.unwrap();
        assert_eq!(index.len(), 5);
    }
}
