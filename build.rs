use std::io::BufWriter;
use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_version = get_git_version();
    println!("cargo:rustc-env=GIT_VERSION={}", git_version);

    println!("cargo:rerun-if-changed=favicon.svg");
    generate_favicons();
}

fn get_git_version() -> String {
    // Falls back to the commit hash without tags, and to "dev" outside git.
    Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "dev".to_string())
}

/// Renders favicon.svg into the default link icon (`favicon.png`) and the
/// site icon (`favicon.ico`).
fn generate_favicons() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    let svg_data = std::fs::read("favicon.svg").expect("Failed to read favicon.svg");
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(&svg_data, &options).expect("Failed to parse SVG");

    let png_data = render_svg_to_png(&tree, 64);
    std::fs::write(out_path.join("favicon.png"), png_data).expect("Failed to write favicon.png");

    generate_ico(&tree, out_path);
}

fn render_svg_to_png(tree: &resvg::usvg::Tree, size: u32) -> Vec<u8> {
    let tree_size = tree.size();
    let scale = size as f32 / tree_size.width().max(tree_size.height());

    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size).unwrap();

    // Center non-square artwork.
    let offset_x = (size as f32 - tree_size.width() * scale) / 2.0;
    let offset_y = (size as f32 - tree_size.height() * scale) / 2.0;

    let transform =
        resvg::tiny_skia::Transform::from_scale(scale, scale).post_translate(offset_x, offset_y);

    resvg::render(tree, transform, &mut pixmap.as_mut());
    pixmap.encode_png().unwrap()
}

fn generate_ico(tree: &resvg::usvg::Tree, out_path: &Path) {
    let file = std::fs::File::create(out_path.join("favicon.ico"))
        .expect("Failed to create favicon.ico");
    let mut icon_dir = ico::IconDir::new(ico::ResourceType::Icon);

    for size in [16u32, 32, 48] {
        let png_data = render_svg_to_png(tree, size);
        let rgba = image::load_from_memory(&png_data)
            .expect("Failed to load PNG")
            .to_rgba8();
        let ico_image = ico::IconImage::from_rgba_data(size, size, rgba.into_raw());
        icon_dir.add_entry(ico::IconDirEntry::encode(&ico_image).unwrap());
    }

    icon_dir
        .write(BufWriter::new(file))
        .expect("Failed to write ICO");
}
