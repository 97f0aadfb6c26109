//! Page shell shared by every full-page response.

use super::escape;

/// Generate the HTML shell for the application.
pub fn html_shell(title: &str, sidebar: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="vi" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="VPBank Text2SQL Assistant">
    <title>{title} - VPBank Text2SQL</title>

    <!-- HTMX and Extensions (local) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>
    <script src="/static/vendor/htmx-sse.js"></script>
    <script defer src="/static/vendor/alpine.min.js"></script>

    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="min-h-screen bg-background text-textPrimary antialiased">
    <div id="app-shell" class="flex h-screen overflow-hidden">
        {sidebar}
        <main id="app" class="flex-1 flex flex-col overflow-hidden">
            {content}
        </main>
    </div>
</body>
</html>"#,
        title = escape(title),
    )
}

/// Minimal shell for pages without the sidebar (login).
pub fn html_shell_bare(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="vi" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - VPBank Text2SQL</title>
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="min-h-screen bg-background text-textPrimary antialiased">
    <main class="flex min-h-screen items-center justify-center px-4">
        {content}
    </main>
</body>
</html>"#,
        title = escape(title),
    )
}
