#![allow(dead_code)]

use tokio::runtime::Runtime;

pub fn bench_runtime() -> Runtime {
    Runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

/// A lesson of `sections` repetitions of prose, code and every directive kind.
pub fn synthetic_lesson(sections: usize) -> String {
    let section = r#"## Section

Some *prose* with `code`, a [link](https://example.com) and **bold** text.

- one
- two

```executable:javascript
console.log(1 + 1);
```

:::quiz
Which is a block element?
- [x] div
- [ ] span
:::

:::fill-blank
CSS stands for {Cascading} Style {Sheets|sheets}.
:::

:::exercise Double it
Write `main`.
:::hint
Multiply by two
:::
```tests
- input: 2
  expectedOutput: 4
```
:::

"#;
    section.repeat(sections)
}
