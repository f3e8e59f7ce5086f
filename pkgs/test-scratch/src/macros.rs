// Exported at the crate root so tests can write `test_scratch::test_name!()`

/// Expands to the path of the enclosing function, e.g. `my_tests::creates_output`.
/// Closures are looked through, so the name is the same inside an iterator adapter.
#[macro_export]
macro_rules! test_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let full = type_name_of(f);
        let mut name = full.strip_suffix("::f").unwrap_or(full);
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}
