// Rendering template files from disk with layered scopes.
// Run with: cargo test -p stupidly-render --test templates

use std::fs;

use serde_json::json;
use stupidly_core::{RenderScope, Scope};
use stupidly_render::{RenderError, Renderer};

fn layer(value: serde_json::Value) -> Scope {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Scope::new(),
    }
}

#[test]
fn renders_file_with_nested_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.lua");
    fs::write(
        &path,
        r#"
local total = 0
echo("<h2>", customer.name, "</h2><ul>")
for _, line in ipairs(lines) do
    total = total + line.qty * line.price
    echo("<li>", line.sku, " x", line.qty, "</li>")
end
echo("</ul><p>", string.format("%.2f", total), "</p>")
"#,
    )
    .unwrap();

    let scope = RenderScope::from(layer(json!({
        "customer": { "name": "Ada" },
        "lines": [
            { "sku": "A-1", "qty": 2, "price": 1.5 },
            { "sku": "B-2", "qty": 1, "price": 4.25 }
        ]
    })));

    let out = Renderer::new().render(&path, &scope).unwrap();
    assert_eq!(out, "<h2>Ada</h2><ul><li>A-1 x2</li><li>B-2 x1</li></ul><p>7.25</p>");
}

#[test]
fn later_layers_win() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.lua");
    fs::write(&path, "echo(title, '|', site)").unwrap();

    let shared = layer(json!({ "title": "shared", "site": "S" }));
    let local = layer(json!({ "title": "local" }));
    let scope = RenderScope::from_layers([&shared, &local]);

    assert_eq!(Renderer::new().render(&path, &scope).unwrap(), "local|S");
}

#[test]
fn execution_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.lua");
    fs::write(&path, "echo('a')\necho('b')\nundefined_fn()\n").unwrap();

    let err = Renderer::new().render(&path, &RenderScope::new()).unwrap_err();
    match err {
        RenderError::Execution { template, line, .. } => {
            assert_eq!(template, path.display().to_string());
            assert_eq!(line, Some(3));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}
