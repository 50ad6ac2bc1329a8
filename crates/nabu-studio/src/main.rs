use std::rc::{Rc, Weak};

use anyhow::Result;
use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_ui::prelude::*;

const TEMPLATE: &str = include_str!("../ui/main.json");
const FRAMES: u64 = 6;

fn task(title: &str, done: bool) -> Value {
    Value::object(Rc::new(Record::new().with("title", title).with("done", done)))
}

/// Recomputes the derived fields the template reads.
fn refresh_counts(data: &Record) {
    let open = data
        .get("tasks")
        .items()
        .unwrap_or_default()
        .iter()
        .filter(|task| !task.get_named("done").truthy())
        .count();
    data.insert("open", open as i64);
    data.insert("all_done", open == 0);
}

fn toggle(data: Weak<Record>) -> Function {
    Function::native("toggle", move |_, args| {
        let task = args.first().cloned().unwrap_or_default();
        let Value::Object(object) = &task else {
            return Err(EvalError::native(format!("cannot toggle {}", task.type_name())));
        };
        let done = !task.get_named("done").truthy();
        if !object.set("done", Value::Bool(done)) {
            return Err(EvalError::native("task is read-only"));
        }
        if let Some(data) = data.upgrade() {
            refresh_counts(&data);
        }
        Ok(Value::Bool(done))
    })
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    println!();
    println!("  nabu studio · headless renderer");
    println!();

    let data = Rc::new(
        Record::new()
            .with("title", "Release checklist")
            .with("frame", 0)
            .with("tasks", vec![
                task("Write changelog", true),
                task("Tag release", false),
                task("Publish crates", false),
            ]),
    );
    data.insert("toggle", toggle(Rc::downgrade(&data)));
    refresh_counts(&data);

    Application::new()
        .title("nabu studio")
        .template_str(TEMPLATE)
        .data(data)
        .on_frame(|app| {
            let frame = app.time().map_or(0, |t| t.frame_index);
            app.data().insert("frame", frame as i64);

            match frame {
                // Toggle the open tasks, one per frame. The list itself is
                // unchanged, so the items are updated in place.
                1 | 2 => {
                    let item = app.root().find("tasks").and_then(|list| list.children().get(frame as usize).cloned());
                    if let Some(item) = item {
                        if let Err(err) = item.dispatch_event("toggle", Value::Null) {
                            log::error!("toggle failed: {}", err);
                        }
                    }
                }
                // A new list rebuilds every item.
                3 => {
                    let mut tasks = app.data().get("tasks").to_vec().unwrap_or_default();
                    tasks.push(task("Announce", false));
                    app.data().insert("tasks", tasks);
                    refresh_counts(app.data());
                }
                _ => {}
            }

            println!("── frame {} ──", frame);
            print!("{}", render_outline(app.root()));

            if frame + 1 >= FRAMES {
                app.exit();
            } else {
                let _ = app.request_update();
            }
        })
        .run(RuntimeConfig { target_fps: 30, ..RuntimeConfig::default() })
}
