use crate::{FrameRequest, GpuPresenter, ImageTexture, PresentError, clear_color};

impl GpuPresenter {
    pub(crate) fn resize_surface(&mut self, width: u32, height: u32) {
        // A minimized window reports zero; keep the last configuration until it returns.
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub(crate) fn present_frame(&mut self, frame: &FrameRequest<'_>) -> Result<(), PresentError> {
        frame.validate()?;
        frame.check_texture_limit(self.device.limits().max_texture_dimension_2d)?;
        self.upload_image(frame);

        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(PresentError::Skipped("surface texture timed out".to_owned()));
            }
            Err(error @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Err(PresentError::Skipped(format!(
                    "surface reconfigured after: {error}"
                )));
            }
            Err(error) => return Err(PresentError::Fatal(error.to_string())),
        };
        let target_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("presenter.frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("presenter.blit"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(
                            frame.background,
                            self.surface_config.format.is_srgb(),
                        )),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            // The layout may lag one resize behind the surface; never draw outside it.
            let dest = frame.dest_rect;
            let x = dest.x.min(self.surface_config.width);
            let y = dest.y.min(self.surface_config.height);
            let width = dest.width.min(self.surface_config.width - x);
            let height = dest.height.min(self.surface_config.height - y);

            if let Some(image) = &self.image
                && width > 0
                && height > 0
            {
                pass.set_viewport(x as f32, y as f32, width as f32, height as f32, 0.0, 1.0);
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &image.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn upload_image(&mut self, frame: &FrameRequest<'_>) {
        let size_matches = self.image.as_ref().is_some_and(|image| {
            image.width == frame.image_width && image.height == frame.image_height
        });
        if !size_matches {
            self.image = Some(self.create_image_texture(frame.image_width, frame.image_height));
        }
        let Some(image) = &self.image else {
            return;
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &image.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.image_width * 4),
                rows_per_image: Some(frame.image_height),
            },
            wgpu::Extent3d {
                width: frame.image_width,
                height: frame.image_height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_image_texture(&self, width: u32, height: u32) -> ImageTexture {
        tracing::debug!(width, height, "allocating image texture");
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("presenter.image"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("presenter.image_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        ImageTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }
}
