//! Embedded static resources.
//!
//! The live-reload client is minified by `build.rs` and gets its WebSocket
//! port filled in when served. The transformer's runtime helpers are
//! bundled from source so projects don't need them in `node_modules`.

pub mod helpers {
    /// Specifier prefix the transformer imports helpers from.
    pub const MODULE_PREFIX: &str = "@oxc-project/runtime/helpers/";

    macro_rules! helpers {
        ($($name:literal),* $(,)?) => {
            &[$(($name, include_str!(concat!("helpers/", $name, ".js")))),*]
        };
    }

    /// ES5 CommonJS sources, by helper name.
    const HELPERS: &[(&str, &str)] = helpers![
        "OverloadYield",
        "assertClassBrand",
        "asyncGeneratorDelegate",
        "asyncIterator",
        "asyncToGenerator",
        "awaitAsyncGenerator",
        "checkInRHS",
        "checkPrivateRedeclaration",
        "classPrivateFieldGet2",
        "classPrivateFieldInitSpec",
        "classPrivateFieldLooseBase",
        "classPrivateFieldLooseKey",
        "classPrivateFieldSet2",
        "classPrivateMethodInitSpec",
        "defineProperty",
        "extends",
        "get",
        "getPrototypeOf",
        "objectDestructuringEmpty",
        "objectSpread2",
        "objectWithoutProperties",
        "objectWithoutPropertiesLoose",
        "readOnlyError",
        "set",
        "superPropBase",
        "superPropGet",
        "superPropSet",
        "taggedTemplateLiteral",
        "toPrimitive",
        "toPropertyKey",
        "toSetter",
        "typeof",
        "wrapAsyncGenerator",
        "writeOnlyError",
    ];

    /// Name and source of the helper `specifier` imports, if embedded.
    ///
    /// Accepts `@oxc-project/runtime/helpers/<name>` with or without `.js`.
    pub fn lookup(specifier: &str) -> Option<(&'static str, &'static str)> {
        let name = specifier.strip_prefix(MODULE_PREFIX)?;
        let name = name.strip_suffix(".js").unwrap_or(name);
        HELPERS.iter().copied().find(|(helper, _)| *helper == name)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_lookup() {
            let (name, source) = lookup("@oxc-project/runtime/helpers/asyncToGenerator").unwrap();
            assert_eq!(name, "asyncToGenerator");
            assert!(source.contains("module.exports"));
            assert!(lookup("@oxc-project/runtime/helpers/objectSpread2.js").is_some());
            assert!(lookup("@oxc-project/runtime/helpers/usingCtx").is_none());
            assert!(lookup("@babel/runtime/helpers/asyncToGenerator").is_none());
        }

        #[test]
        fn test_helper_requires_stay_embedded() {
            for (name, source) in HELPERS {
                for dependency in source.split("require(\"").skip(1) {
                    let specifier = dependency.split('"').next().unwrap_or_default();
                    assert!(lookup(specifier).is_some(), "{name} requires {specifier}");
                }
            }
        }
    }
}

pub mod serve {
    /// URL path the dev server answers with the live-reload client.
    pub const LIVERELOAD_URL: &str = "/__brisk/livereload.js";

    /// Placeholder `build.rs` leaves in the minified client.
    const WS_PORT_PLACEHOLDER: &str = "__BRISK_WS_PORT__";

    /// Live-reload client, minified at build time.
    const LIVERELOAD_JS: &str = include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js"));

    /// The client, pointed at the WebSocket server on `ws_port`.
    pub fn livereload_js(ws_port: u16) -> String {
        LIVERELOAD_JS.replace(WS_PORT_PLACEHOLDER, &ws_port.to_string())
    }

    /// `<script>` tag injected into served HTML pages.
    pub fn script_tag() -> String {
        format!(r#"<script src="{LIVERELOAD_URL}" defer></script>"#)
    }

}
