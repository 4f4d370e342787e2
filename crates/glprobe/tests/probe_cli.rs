use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

const VERTEX: &str = "attribute vec3 aPosition;
attribute vec2 aUV;
attribute vec3 aNormal;
uniform mat4 uMVMatrix;
uniform mat4 uPMatrix;
varying vec2 vUV;
void main() {
    vUV = aUV;
    gl_Position = uPMatrix * uMVMatrix * vec4(aPosition, 1.0);
}
";

const FRAGMENT: &str = "precision mediump float;
uniform sampler2D uSampler;
varying vec2 vUV;
void main() {
    gl_FragColor = texture2D(uSampler, vUV);
}
";

const MANIFEST: &str = r#"
version = 1
extensions = ["OES_texture_float", "WEBGL_depth_texture"]

[loader]
workers = 2
timeout = "10s"

[[programs]]
name = "scene"
vertex = "scene.vert"
fragment = "scene.frag"
attributes = ["aPosition", "aUV", "aNormal"]

[[textures]]
name = "crate"
source = { path = "assets/crate.png" }
min_filter = "linear_mipmap_linear"
wrap = "repeat"

[[textures]]
name = "scratch"
format = "rgb"
source = { width = 64, height = 32 }

[[meshes]]
name = "box"
width = 2.0
height = 2.0
depth = 2.0

[[framebuffers]]
name = "shadow_pass"

[[shadow_maps]]
name = "sun"
width = 512
height = 512
framebuffer = "shadow_pass"
"#;

fn create_project(root: &Path, manifest: &str, fragment: &str) {
    fs::create_dir_all(root.join("shaders")).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("shaders/scene.vert"), VERTEX).unwrap();
    fs::write(root.join("shaders/scene.frag"), fragment).unwrap();
    fs::write(root.join("glres.toml"), manifest).unwrap();

    let mut image = RgbaImage::new(2, 2);
    for pixel in image.pixels_mut() {
        *pixel = Rgba([200, 120, 40, 255]);
    }
    image.save(root.join("assets/crate.png")).unwrap();
}

fn glprobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_glprobe"))
        .env_remove("GLPROBE_MANIFEST")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run glprobe")
}

fn json_report(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout was not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn entry<'a>(report: &'a Value, table: &str, name: &str) -> &'a Value {
    report[table]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["name"] == name)
        .unwrap_or_else(|| panic!("no {table} entry named {name}"))
}

#[test]
fn probe_builds_every_resource() {
    let root = TempDir::new().unwrap();
    create_project(root.path(), MANIFEST, FRAGMENT);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["--manifest", manifest.to_str().unwrap(), "--json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = json_report(&output);
    assert_eq!(report["extensions"]["missing"].as_array().unwrap().len(), 0);
    assert_eq!(entry(&report, "programs", "scene")["status"], "ok");
    assert_eq!(entry(&report, "meshes", "box")["status"], "ok");
    assert_eq!(entry(&report, "textures", "crate")["status"], "ok");
    assert_eq!(entry(&report, "textures", "crate")["detail"], "2x2");
    assert_eq!(entry(&report, "textures", "scratch")["detail"], "64x32");
    assert_eq!(entry(&report, "framebuffers", "shadow_pass")["status"], "ok");
    assert_eq!(entry(&report, "shadow_maps", "sun")["status"], "ok");
    assert_eq!(entry(&report, "draws", "box")["status"], "ok");
    assert_eq!(report["leaked_objects"], 0);
    assert!(report["command_count"].as_u64().unwrap() > 0);
    assert!(report.get("trace").is_none());
}

#[test]
fn trace_lists_gl_calls() {
    let root = TempDir::new().unwrap();
    create_project(root.path(), MANIFEST, FRAGMENT);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["--manifest", manifest.to_str().unwrap(), "--trace"]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Trace:"));
    assert!(text.contains("drawElements"));
    assert!(text.contains("generateMipmap"));
    assert!(text.contains("framebufferTexture2D"));
}

#[test]
fn broken_shader_fails_the_probe() {
    let root = TempDir::new().unwrap();
    let broken = "precision mediump float;\nvoid main() {\n    gl_FragColor = vec4(1.0);\n";
    create_project(root.path(), MANIFEST, broken);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["--manifest", manifest.to_str().unwrap(), "--json"]);
    assert!(!output.status.success());

    let report = json_report(&output);
    let scene = entry(&report, "programs", "scene");
    assert_eq!(scene["status"], "failed");
    assert!(scene["detail"].as_str().unwrap().contains("fragment"));
    assert_eq!(entry(&report, "draws", "box")["status"], "failed");
    assert_eq!(report["leaked_objects"], 0);
}

#[test]
fn extensions_command_reports_missing_names() {
    let root = TempDir::new().unwrap();
    let manifest = format!(
        "{MANIFEST}\n[device]\nsupported_extensions = [\"OES_texture_float\", \"EXT_frag_depth\"]\n"
    );
    create_project(root.path(), &manifest, FRAGMENT);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["extensions", "--manifest", manifest.to_str().unwrap(), "--json"]);
    assert!(!output.status.success());
    let extensions = json_report(&output);
    assert_eq!(extensions["missing"], serde_json::json!(["WEBGL_depth_texture"]));
    assert_eq!(
        extensions["supported"],
        serde_json::json!(["OES_texture_float", "EXT_frag_depth"])
    );

    let output = glprobe(&["extensions", "--manifest", manifest.to_str().unwrap()]);
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("WEBGL_depth_texture"));
    assert!(text.contains("missing"));
    assert!(text.contains("also supported: EXT_frag_depth"));
}

#[test]
fn missing_extensions_stop_before_building() {
    let root = TempDir::new().unwrap();
    let manifest =
        format!("{MANIFEST}\n[device]\nsupported_extensions = [\"OES_texture_float\"]\n");
    create_project(root.path(), &manifest, FRAGMENT);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["--manifest", manifest.to_str().unwrap(), "--json"]);
    assert!(!output.status.success());

    let report = json_report(&output);
    assert_eq!(report["extensions"]["missing"], serde_json::json!(["WEBGL_depth_texture"]));
    for table in ["programs", "meshes", "textures", "framebuffers", "shadow_maps", "draws"] {
        assert_eq!(report[table].as_array().unwrap().len(), 0, "{table}");
    }
    assert_eq!(report["leaked_objects"], 0);
    assert_eq!(report["diagnostics"].as_array().unwrap().len(), 1);
}

#[test]
fn invalid_manifest_is_rejected() {
    let root = TempDir::new().unwrap();
    create_project(root.path(), "version = 3\n", FRAGMENT);
    let manifest = root.path().join("glres.toml");

    let output = glprobe(&["--manifest", manifest.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported manifest version 3"), "{stderr}");
}
