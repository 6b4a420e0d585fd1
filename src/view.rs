//! HTML rendering of a [`DirectoryView`].

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::{listing::DirectoryView, upload::UPLOAD_FIELD};

const STYLE: &str = r#"
body {
    line-height: 1.5;
    font-family: "Helvetica", "Arial", sans-serif;
    font-weight: 400;
    font-size: 12pt;
    color: #202020;
}
@media (min-width: 850px) {
    body { margin: 0 auto; padding: 0.5em 1em; }
}
h1 { font-size: 14pt; font-weight: 700; }
h2 { font-size: 12pt; font-weight: 700; font-family: monospace; }
td { padding-left: 5px; padding-right: 5px; font-family: monospace; }
a:link, a:visited { color: #67ce2c; }
a:hover { color: #97ee4c; text-decoration: none; }
.muted { color: #808080; }
"#;

/// Renders the index page: upload form, breadcrumbs, then the entry table.
pub fn index_page(view: &DirectoryView) -> Markup {
    let upload_action = format!("/upload/{}", view.current_path.to_url_path());

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "SideGate" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Upload a File" }
                form action=(upload_action) method="POST" enctype="multipart/form-data" {
                    div { input type="file" name=(UPLOAD_FIELD) multiple; }
                    div { input type="submit" value="Upload"; }
                }

                h2 {
                    @for (depth, crumb) in view.breadcrumbs.iter().enumerate() {
                        @let href = format!("/browse/{}", view.current_path.ancestor(depth).to_url_path());
                        a href=(href) { (crumb) } " > "
                    }
                }

                @if view.entries.is_empty() {
                    p class="muted" { "Nothing to show here." }
                } @else {
                    table {
                        @for entry in &view.entries {
                            @let link = entry.relative_path.to_url_path();
                            tr {
                                td { (entry.display_size) }
                                td {
                                    @if entry.is_dir {
                                        a href={"/browse/" (link)} { (entry.name) "/" }
                                    } @else {
                                        a href={"/download/" (link)} { (entry.name) }
                                    }
                                }
                                td class="muted" { (entry.modified.as_deref().unwrap_or("")) }
                            }
                        }
                    }
                }
            }
        }
    }
}
