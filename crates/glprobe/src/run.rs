use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use glres::trace::TraceDevice;
use glres::{
    require_extensions, Device, FetchImageSource, Framebuffer, GpuContext, GpuError, LoadEvent,
    MagFilter, MemoryDiagnostics, Mesh, MinFilter, PixelType, Program, ShaderLibrary, ShadowMap,
    Texture, TextureDescriptor, TextureFormat, TextureLoader, TextureParams, WrapMode,
    MODEL_VIEW_UNIFORM,
};
use resconfig::{
    FormatName, MagFilterName, MinFilterName, PixelTypeName, ResourceManifest, TextureSource,
    TextureEntry, WrapName,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{ExtensionsArgs, ProbeArgs};
use crate::report::{DiagnosticLine, ExtensionReport, ProbeReport, ResourceReport, TraceLine};

type Ctx = GpuContext<TraceDevice>;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_manifest(path: &Path) -> Result<ResourceManifest> {
    ResourceManifest::load(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

fn resolve_root(args: &ProbeArgs) -> PathBuf {
    if let Some(root) = &args.root {
        return root.clone();
    }
    match args.manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn context_for(manifest: &ResourceManifest) -> (Ctx, MemoryDiagnostics) {
    let diagnostics = MemoryDiagnostics::new();
    let device = TraceDevice::new().with_extensions(manifest.supported_extensions().iter());
    let ctx = GpuContext::with_diagnostics(device, Arc::new(diagnostics.clone()));
    (ctx, diagnostics)
}

fn negotiate(ctx: &mut Ctx, required: &[String]) -> Result<ExtensionReport> {
    let missing = match require_extensions(ctx, required) {
        Ok(()) => Vec::new(),
        Err(GpuError::MissingCapability { missing }) => missing,
        Err(err) => return Err(err).context("extension negotiation failed"),
    };
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "required extensions are not supported");
    }
    Ok(ExtensionReport {
        required: required.to_vec(),
        supported: ctx.device().supported_extensions(),
        missing,
    })
}

pub fn extensions(args: &ExtensionsArgs) -> Result<ExtensionReport> {
    let manifest = load_manifest(&args.manifest)?;
    let (mut ctx, _) = context_for(&manifest);
    negotiate(&mut ctx, &manifest.extensions)
}

struct Built {
    programs: Vec<(String, Program<TraceDevice>)>,
    meshes: Vec<(String, Mesh<TraceDevice>)>,
    textures: Vec<(String, Texture<TraceDevice>)>,
    framebuffers: Vec<(String, Framebuffer<TraceDevice>)>,
    shadow_maps: Vec<(String, ShadowMap<TraceDevice>)>,
}

pub fn probe(args: &ProbeArgs) -> Result<ProbeReport> {
    let manifest = load_manifest(&args.manifest)?;
    let root = resolve_root(args);
    let timeout = args.timeout.unwrap_or(manifest.loader.timeout);
    tracing::debug!(
        manifest = %args.manifest.display(),
        root = %root.display(),
        timeout = ?timeout,
        workers = manifest.loader.workers,
        "probing resource manifest"
    );

    let (mut ctx, diagnostics) = context_for(&manifest);
    let mut report = ProbeReport {
        manifest: args.manifest.display().to_string(),
        ..ProbeReport::default()
    };
    report.extensions = negotiate(&mut ctx, &manifest.extensions)?;
    if !report.extensions.is_ok() {
        tracing::error!("missing extensions are fatal; nothing else was built");
        record_device(&ctx, &diagnostics, args.trace, &mut report);
        return Ok(report);
    }

    let source = FetchImageSource::new()
        .context("failed to construct image client")?
        .with_root(&root);
    let mut loader = TextureLoader::new(Arc::new(source), manifest.loader.workers)
        .context("failed to start texture loader")?;

    let mut built = Built {
        programs: Vec::new(),
        meshes: Vec::new(),
        textures: Vec::new(),
        framebuffers: Vec::new(),
        shadow_maps: Vec::new(),
    };

    let library = ShaderLibrary::new(manifest.shader_directory(&root));
    tracing::debug!(shaders = %library.root().display(), "resolving shader sources");
    for item in &manifest.programs {
        match Program::from_sources(
            &mut ctx,
            &library,
            &item.vertex,
            &item.fragment,
            item.attributes.as_slice(),
        ) {
            Ok(program) => {
                let uniforms = program.uniform_names().join(", ");
                report.programs.push(ResourceReport::ok(
                    &item.name,
                    (!uniforms.is_empty()).then_some(uniforms),
                ));
                built.programs.push((item.name.clone(), program));
            }
            Err(err) => {
                tracing::warn!(program = %item.name, error = %err, "program failed to build");
                report.programs.push(ResourceReport::failed(&item.name, err));
            }
        }
    }

    for item in &manifest.meshes {
        match Mesh::new_box(&mut ctx, item.width, item.height, item.depth) {
            Ok(mesh) => {
                let detail = format!("{} indices ({:?})", mesh.index_count(), mesh.index_type());
                report.meshes.push(ResourceReport::ok(&item.name, Some(detail)));
                built.meshes.push((item.name.clone(), mesh));
            }
            Err(err) => report.meshes.push(ResourceReport::failed(&item.name, err)),
        }
    }

    for item in &manifest.textures {
        match build_texture(&mut ctx, &mut loader, item) {
            Ok(texture) => built.textures.push((item.name.clone(), texture)),
            Err(err) => report.textures.push(ResourceReport::failed(&item.name, err)),
        }
    }

    for item in &manifest.framebuffers {
        match Framebuffer::new(&mut ctx) {
            Ok(framebuffer) => built.framebuffers.push((item.name.clone(), framebuffer)),
            Err(err) => report.framebuffers.push(ResourceReport::failed(&item.name, err)),
        }
    }

    for item in &manifest.shadow_maps {
        match ShadowMap::new(&mut ctx, item.width, item.height) {
            Ok(shadow) => {
                let mut detail = format!("{}x{}", item.width, item.height);
                if let Some(target) = &item.framebuffer {
                    if let Some((_, framebuffer)) =
                        built.framebuffers.iter().find(|(name, _)| name == target)
                    {
                        shadow.attach_to_fbo(&mut ctx, framebuffer);
                        detail.push_str(&format!(" -> {target}"));
                    }
                }
                report.shadow_maps.push(ResourceReport::ok(&item.name, Some(detail)));
                built.shadow_maps.push((item.name.clone(), shadow));
            }
            Err(err) => report.shadow_maps.push(ResourceReport::failed(&item.name, err)),
        }
    }
    Framebuffer::bind_default(&mut ctx);

    for event in loader.pump_until_idle(&mut ctx, timeout) {
        match &event {
            LoadEvent::Completed { path, width, height } => {
                tracing::info!(%path, width, height, "texture loaded");
            }
            LoadEvent::Failed { path, error } => {
                tracing::warn!(%path, %error, "texture failed to load");
            }
            LoadEvent::Dropped { path } => tracing::debug!(%path, "texture load dropped"),
        }
    }

    for (name, texture) in &built.textures {
        report
            .textures
            .push(ResourceReport::texture(name, &texture.state()));
    }
    report.textures.sort_by_key(|entry| {
        manifest
            .textures
            .iter()
            .position(|item| item.name == entry.name)
    });

    for (name, framebuffer) in &built.framebuffers {
        let status = framebuffer.status(&mut ctx);
        let attached: Vec<String> = framebuffer
            .attached()
            .iter()
            .map(|attachment| attachment.to_string())
            .collect();
        report
            .framebuffers
            .push(ResourceReport::framebuffer(name, status, &attached));
    }
    Framebuffer::bind_default(&mut ctx);

    draw_meshes(&mut ctx, &built, &mut report);

    teardown(&mut ctx, built);
    loader.shutdown();

    record_device(&ctx, &diagnostics, args.trace, &mut report);
    Ok(report)
}

fn record_device(
    ctx: &Ctx,
    diagnostics: &MemoryDiagnostics,
    trace: bool,
    report: &mut ProbeReport,
) {
    report.diagnostics = diagnostics
        .entries()
        .into_iter()
        .map(DiagnosticLine::from)
        .collect();
    report.command_count = ctx.device().commands().len();
    report.leaked_objects = ctx.device().live_objects();
    if trace {
        report.trace = Some(ctx.device().commands().iter().map(TraceLine::from).collect());
    }
}

fn build_texture(
    ctx: &mut Ctx,
    loader: &mut TextureLoader<TraceDevice>,
    item: &TextureEntry,
) -> glres::Result<Texture<TraceDevice>> {
    let mut params = TextureParams::new(
        texture_format(item.format),
        mag_filter(item.mag_filter),
        min_filter(item.min_filter),
    );
    if let Some(wrap) = item.wrap {
        params = params.with_wrap(wrap_mode(wrap));
    }
    match &item.source {
        TextureSource::Image { path } => loader.load(ctx, path, params),
        TextureSource::Empty {
            width,
            height,
            pixel_type: kind,
        } => Texture::new(
            ctx,
            &TextureDescriptor::new(params, pixel_type(*kind), *width, *height),
        ),
    }
}

fn draw_meshes(ctx: &mut Ctx, built: &Built, report: &mut ProbeReport) {
    if built.meshes.is_empty() {
        return;
    }
    let Some((program_name, program)) = built
        .programs
        .iter()
        .find(|(_, program)| program.has_uniform(MODEL_VIEW_UNIFORM))
    else {
        for (name, _) in &built.meshes {
            report.draws.push(ResourceReport::failed(
                name,
                format!("no program declares {MODEL_VIEW_UNIFORM}"),
            ));
        }
        return;
    };

    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    program.use_program(ctx);
    for (name, mesh) in &built.meshes {
        match mesh.draw(ctx, &view, program) {
            Ok(()) => report.draws.push(ResourceReport::ok(
                name,
                Some(format!("with program '{program_name}'")),
            )),
            Err(err) => report.draws.push(ResourceReport::failed(name, err)),
        }
    }
}

fn teardown(ctx: &mut Ctx, built: Built) {
    ctx.reset_bindings();
    for (_, program) in built.programs {
        program.delete(ctx);
    }
    for (_, mesh) in built.meshes {
        mesh.delete(ctx);
    }
    for (_, texture) in built.textures {
        texture.delete(ctx);
    }
    for (_, shadow) in built.shadow_maps {
        shadow.delete(ctx);
    }
    for (_, framebuffer) in built.framebuffers {
        framebuffer.delete(ctx);
    }
}

fn texture_format(name: FormatName) -> TextureFormat {
    match name {
        FormatName::Alpha => TextureFormat::Alpha,
        FormatName::Luminance => TextureFormat::Luminance,
        FormatName::LuminanceAlpha => TextureFormat::LuminanceAlpha,
        FormatName::Rgb => TextureFormat::Rgb,
        FormatName::Rgba => TextureFormat::Rgba,
        FormatName::DepthComponent => TextureFormat::DepthComponent,
    }
}

fn pixel_type(name: PixelTypeName) -> PixelType {
    match name {
        PixelTypeName::UnsignedByte => PixelType::UnsignedByte,
        PixelTypeName::UnsignedShort => PixelType::UnsignedShort,
        PixelTypeName::UnsignedInt => PixelType::UnsignedInt,
        PixelTypeName::Float => PixelType::Float,
    }
}

fn mag_filter(name: MagFilterName) -> MagFilter {
    match name {
        MagFilterName::Nearest => MagFilter::Nearest,
        MagFilterName::Linear => MagFilter::Linear,
    }
}

fn min_filter(name: MinFilterName) -> MinFilter {
    match name {
        MinFilterName::Nearest => MinFilter::Nearest,
        MinFilterName::Linear => MinFilter::Linear,
        MinFilterName::NearestMipmapNearest => MinFilter::NearestMipmapNearest,
        MinFilterName::NearestMipmapLinear => MinFilter::NearestMipmapLinear,
        MinFilterName::LinearMipmapNearest => MinFilter::LinearMipmapNearest,
        MinFilterName::LinearMipmapLinear => MinFilter::LinearMipmapLinear,
    }
}

fn wrap_mode(name: WrapName) -> WrapMode {
    match name {
        WrapName::Repeat => WrapMode::Repeat,
        WrapName::ClampToEdge => WrapMode::ClampToEdge,
        WrapName::MirroredRepeat => WrapMode::MirroredRepeat,
    }
}
