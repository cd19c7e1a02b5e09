use santa_core::{GiftLimit, Participant};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn display_limit(gift_limit: &GiftLimit, currency: &str) -> String {
    if currency.is_empty() {
        gift_limit.to_string()
    } else {
        format!("{gift_limit} {currency}")
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
<main>
{body}
</main>
<script src="/snow.js"></script>
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index(participants: &[Participant], gift_limit: &GiftLimit, currency: &str) -> String {
    let options: String = participants
        .iter()
        .map(|name| {
            let name = escape(name);
            format!("<option value=\"{name}\">{name}</option>\n")
        })
        .collect();

    layout(
        "Secret Santa",
        &format!(
            r#"<h1>Secret Santa</h1>
<p>Gift limit: <b>{limit}</b></p>
<form method="post" action="/result">
<label>Who are you?
<select name="name" required>
{options}</select>
</label>
<label>Email (optional)
<input type="email" name="email">
</label>
<button type="submit">Show my recipient</button>
</form>"#,
            limit = escape(&display_limit(gift_limit, currency)),
        ),
    )
}

pub fn result(giver: &str, receiver: &str, gift_limit: &GiftLimit, currency: &str) -> String {
    layout(
        "Your Secret Santa",
        &format!(
            r#"<h1>Hello, {giver}!</h1>
<p>You are giving a gift to: <b class="receiver">{receiver}</b></p>
<p>Gift limit: <b>{limit}</b></p>
<a href="/">Back</a>"#,
            giver = escape(giver),
            receiver = escape(receiver),
            limit = escape(&display_limit(gift_limit, currency)),
        ),
    )
}

pub fn admin() -> String {
    layout(
        "Secret Santa admin",
        r#"<h1>Redraw pairs</h1>
<form method="post" action="/admin">
<label>Password
<input type="password" name="pass" required>
</label>
<label>New gift limit
<input type="text" name="limit" required>
</label>
<button type="submit">Redraw</button>
</form>"#,
    )
}

pub fn admin_updated() -> String {
    "<h2>The assignment has been updated!</h2>\n<a href=\"/\">Back</a>".to_string()
}
