use cgmath::{Matrix, Matrix4, SquareMatrix};

use super::{
    camera::CameraRig,
    render::{Renderer, DEPTH_FORMAT},
    view_data::{DirtyFlags, Vertex, ViewData},
};

use wgpu::{util::DeviceExt, BindGroup, BindGroupLayout, Buffer, CompareFunction, RenderPipeline};

/// cgmath produces OpenGL clip space (z in -1..1); wgpu wants 0..1.
#[rustfmt::skip]
const OPENGL_TO_WGPU_MATRIX: Matrix4<f64> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

struct ViewBuffer {
    camera_bind_group_layout: BindGroupLayout,
    camera_bind_group: BindGroup,
    view_buffer: Buffer,
    proj_buffer: Buffer,
    normal_mat_buffer: Buffer,
}

struct Pipeline {
    material_bind_group_layout: BindGroupLayout,
    pipeline: RenderPipeline,
}

/// Shared GPU state: camera uniforms and the mesh pipeline.
#[derive(Default)]
pub(crate) struct ViewCore {
    view_buffer: Option<ViewBuffer>,
    pipeline: Option<Pipeline>,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn matrix_buffer(render: &Renderer, label: &str) -> Buffer {
    render
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[0.0f32; 16]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
}

fn to_gpu(m: Matrix4<f64>) -> [[f32; 4]; 4] {
    let m: Matrix4<f32> = m.cast().unwrap_or_else(Matrix4::identity);
    m.into()
}

impl ViewCore {
    fn init_view_buffer(render: &Renderer) -> ViewBuffer {
        let camera_bind_group_layout =
            render
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("camera_bind_group_layout"),
                    entries: &[
                        uniform_entry(0, wgpu::ShaderStages::VERTEX),
                        uniform_entry(1, wgpu::ShaderStages::VERTEX),
                        uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
                        uniform_entry(3, wgpu::ShaderStages::VERTEX),
                    ],
                });

        let view_buffer = matrix_buffer(render, "view_buffer");
        let proj_buffer = matrix_buffer(render, "proj_buffer");
        let normal_mat_buffer = matrix_buffer(render, "normal_matrix_buffer");

        // Because Downlevel flags BUFFER_BINDINGS_NOT_16_BYTE_ALIGNED are required but not supported on web
        // we use vec4 to represent light position instead of vec3.
        // The light sits at the eye.
        let light_position_buffer =
            render
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("light_position_buffer"),
                    contents: bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, 1.0]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

        let camera_bind_group = render.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: view_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: proj_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: light_position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: normal_mat_buffer.as_entire_binding(),
                },
            ],
            label: Some("camera_bind_group"),
        });
        ViewBuffer {
            camera_bind_group_layout,
            camera_bind_group,
            view_buffer,
            proj_buffer,
            normal_mat_buffer,
        }
    }

    fn init_pipeline(render: &Renderer, camera_bind_group_layout: &BindGroupLayout) -> Pipeline {
        let material_bind_group_layout =
            render
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("material_bind_group_layout"),
                    entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
                });

        let shader = render
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
            });

        let render_pipeline_layout =
            render
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("render_pipeline_layout"),
                    bind_group_layouts: &[camera_bind_group_layout, &material_bind_group_layout],
                    push_constant_ranges: &[],
                });

        // Section cuts expose back faces, so nothing is culled.
        let pipeline = render
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("render_pipeline"),
                layout: Some(&render_pipeline_layout),
                cache: None,
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: render.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        Pipeline {
            material_bind_group_layout,
            pipeline,
        }
    }

    /// Uploads whatever is dirty, then records draw calls for visible meshes.
    pub(crate) fn render(
        &mut self,
        render: &Renderer,
        render_pass: &mut wgpu::RenderPass<'_>,
        data: &mut [ViewData],
        camera: &CameraRig,
    ) {
        let view_buffer = self
            .view_buffer
            .get_or_insert_with(|| Self::init_view_buffer(render));
        let pipeline = self
            .pipeline
            .get_or_insert_with(|| Self::init_pipeline(render, &view_buffer.camera_bind_group_layout));

        for item in data.iter_mut() {
            if item.buffers.is_none() {
                item.init_resources(render, &pipeline.material_bind_group_layout);
            }
            if item.dirty.contains(DirtyFlags::DIRTY_VERTEX) {
                item.update_vertex_buffer(render);
                item.dirty.remove(DirtyFlags::DIRTY_VERTEX);
            }
            if item.dirty.contains(DirtyFlags::DIRTY_MATERIAL) {
                item.update_material(render);
                item.dirty.remove(DirtyFlags::DIRTY_MATERIAL);
            }
        }

        Self::update_matrix(view_buffer, render, camera);

        render_pass.set_bind_group(0, &view_buffer.camera_bind_group, &[]);
        for item in data.iter() {
            if item.visible {
                item.render(render_pass, &pipeline.pipeline);
            }
        }
    }

    fn update_matrix(view_buffer: &ViewBuffer, render: &Renderer, camera: &CameraRig) {
        let view = camera.state().view_matrix();
        let proj = OPENGL_TO_WGPU_MATRIX * camera.projection_matrix();
        let normal_mat = view
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity);

        let view_data = to_gpu(view);
        let proj_data = to_gpu(proj);
        let normal_mat_data = to_gpu(normal_mat);
        render.queue.write_buffer(
            &view_buffer.view_buffer,
            0,
            bytemuck::cast_slice(&view_data),
        );
        render.queue.write_buffer(
            &view_buffer.proj_buffer,
            0,
            bytemuck::cast_slice(&proj_data),
        );
        render.queue.write_buffer(
            &view_buffer.normal_mat_buffer,
            0,
            bytemuck::cast_slice(&normal_mat_data),
        );
    }
}
