//! Login, welcome and knowledge-base pages.

use super::escape;

/// Welcome content shown when no chat is selected.
pub fn welcome_content() -> String {
    let mut suggestions = String::new();
    for question in [
        "Top 10 khách hàng có số dư tiền gửi lớn nhất",
        "Tăng trưởng CASA 6 tháng gần nhất",
        "Dư nợ tín dụng theo chi nhánh",
    ] {
        suggestions.push_str(&format!(
            r##"                <button type="button"
                        class="rounded-2xl bg-surface px-5 py-4 text-left text-sm hover:bg-surfaceVariant transition-colors"
                        hx-post="/ui/send"
                        hx-vals='{{"message": "{q}"}}'
                        hx-target="#messages"
                        hx-swap="innerHTML">{q}</button>
"##,
            q = escape(question),
        ));
    }

    format!(
        r##"
    <header class="flex items-center gap-3 px-6 py-4 bg-surfaceContainer shrink-0">
        <h2 class="font-semibold text-lg">VPBank Text2SQL Assistant</h2>
    </header>
    <div id="messages" class="flex-1 overflow-y-auto px-6 py-4">
        <div class="mx-auto mt-16 max-w-xl text-center">
            <h1 class="text-2xl font-bold">Trợ lý dữ liệu ngân hàng</h1>
            <p class="mt-2 text-textMuted">Đặt câu hỏi bằng tiếng Việt, nhận câu trả lời kèm bảng và biểu đồ.</p>
            <div class="mt-8 grid gap-3">
{suggestions}            </div>
        </div>
    </div>
    <div class="p-5 bg-surfaceContainer shrink-0">
        <form class="flex gap-3"
              hx-post="/ui/send"
              hx-target="#messages"
              hx-swap="innerHTML"
              hx-on--after-request="this.reset()">
            <textarea name="message"
                      placeholder="Hỏi về dữ liệu ngân hàng..."
                      class="flex-1 min-h-[48px] max-h-[200px] resize-none rounded-2xl bg-surface px-5 py-3.5 text-textPrimary placeholder:text-textMuted focus:outline-none focus:ring-2 focus:ring-primary"
                      rows="1"
                      required></textarea>
            <button type="submit"
                    class="h-12 w-12 shrink-0 rounded-2xl bg-primary text-white hover:bg-primaryMuted active:scale-95 transition-all">➤</button>
        </form>
    </div>
    "##
    )
}

/// Login page content, rendered inside the bare shell.
pub fn login_content(error: Option<&str>) -> String {
    let notice = error.map_or_else(String::new, |msg| {
        format!(
            r#"            <p class="rounded-xl bg-danger/10 px-4 py-3 text-sm text-danger">{}</p>
"#,
            escape(msg)
        )
    });
    format!(
        r#"
    <div class="w-full max-w-sm rounded-3xl bg-surface p-8 shadow-lg">
        <h1 class="text-xl font-bold">VPBank Text2SQL</h1>
        <p class="mt-1 text-sm text-textMuted">Đăng nhập để tiếp tục</p>
        <form class="mt-6 space-y-4" hx-post="/login" hx-target="closest div" hx-swap="outerHTML">
{notice}            <input type="text" name="username" placeholder="Tên đăng nhập" required
                   class="w-full rounded-xl bg-surfaceVariant px-4 py-3 text-sm focus:outline-none focus:ring-2 focus:ring-primary">
            <input type="password" name="password" placeholder="Mật khẩu" required
                   class="w-full rounded-xl bg-surfaceVariant px-4 py-3 text-sm focus:outline-none focus:ring-2 focus:ring-primary">
            <button type="submit"
                    class="w-full rounded-xl bg-primary py-3 text-sm font-medium text-white hover:bg-primaryMuted transition-all">Đăng nhập</button>
        </form>
    </div>
    "#
    )
}

/// Knowledge-base upload page content.
pub fn knowledge_content(notice: Option<&str>) -> String {
    format!(
        r##"
    <header class="flex items-center gap-3 px-6 py-4 bg-surfaceContainer shrink-0">
        <h2 class="font-semibold text-lg">Tri thức nghiệp vụ</h2>
    </header>
    <div class="flex-1 overflow-y-auto px-6 py-8">
        <div class="mx-auto max-w-xl rounded-3xl bg-surface p-8">
            <p class="text-sm text-textMuted">Tải lên tài liệu nghiệp vụ để cải thiện chất lượng sinh SQL.</p>
            <form class="mt-6 space-y-4"
                  hx-post="/ui/knowledge/upload"
                  hx-encoding="multipart/form-data"
                  hx-target="#upload-result"
                  hx-swap="innerHTML">
                <input type="file" name="file" required
                       class="w-full rounded-xl bg-surfaceVariant px-4 py-3 text-sm">
                <button type="submit"
                        class="rounded-xl bg-primary px-6 py-3 text-sm font-medium text-white hover:bg-primaryMuted transition-all">Tải lên</button>
            </form>
            <div id="upload-result" class="mt-4 text-sm">{notice}</div>
        </div>
    </div>
    "##,
        notice = notice.map(escape).unwrap_or_default(),
    )
}

/// Fragment confirming or rejecting an upload.
pub fn upload_result(ok: bool, detail: &str) -> String {
    let class = if ok { "text-success" } else { "text-danger" };
    format!(r#"<p class="{class}">{}</p>"#, escape(detail))
}
