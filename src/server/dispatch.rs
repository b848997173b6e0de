//! Request dispatcher
//!
//! Maps each parsed request to its handler. The caller holds the state
//! lock for the whole call, so a handler observes and mutates global
//! state atomically; replies are returned for the connection layer to
//! frame with the request's sequence number.

use crate::frontend::Frontend;
use crate::protocol::error::XError;
use crate::protocol::requests::Request;
use crate::protocol::types::*;
use crate::server::handlers::{self, HandlerResult};
use crate::server::state::ServerState;

pub async fn dispatch_request(
    state: &mut ServerState,
    fe: &dyn Frontend,
    client: ClientId,
    request: &Request,
) -> HandlerResult {
    match request {
        Request::CreateWindow {
            depth,
            wid,
            parent,
            x,
            y,
            width,
            height,
            border_width,
            class,
            visual,
            attrs,
        } => {
            handlers::window::create_window(
                state,
                fe,
                client,
                *depth,
                *wid,
                *parent,
                *x,
                *y,
                *width,
                *height,
                *border_width,
                *class,
                *visual,
                attrs,
            )
            .await
        }
        Request::ChangeWindowAttributes { window, attrs } => {
            handlers::window::change_window_attributes(state, client, *window, attrs).await
        }
        Request::GetWindowAttributes { window } => {
            handlers::window::get_window_attributes(state, client, *window)
        }
        Request::DestroyWindow { window } => {
            handlers::window::destroy_window(state, fe, *window).await
        }
        Request::DestroySubwindows { window } => {
            handlers::window::destroy_subwindows(state, fe, *window).await
        }
        Request::ChangeSaveSet { insert, window } => {
            handlers::window::change_save_set(state, client, *insert, *window)
        }
        Request::ReparentWindow {
            window,
            parent,
            x,
            y,
        } => handlers::window::reparent_window(state, fe, *window, *parent, *x, *y).await,
        Request::MapWindow { window } => handlers::window::map_window(state, fe, *window).await,
        Request::MapSubwindows { window } => {
            handlers::window::map_subwindows(state, fe, *window).await
        }
        Request::UnmapWindow { window } => {
            handlers::window::unmap_window(state, fe, *window).await
        }
        Request::UnmapSubwindows { window } => {
            handlers::window::unmap_subwindows(state, fe, *window).await
        }
        Request::ConfigureWindow { window, values } => {
            handlers::window::configure_window(state, fe, *window, values).await
        }
        Request::CirculateWindow {
            raise_lowest,
            window,
        } => handlers::window::circulate_window(state, fe, *raise_lowest, *window).await,
        Request::GetGeometry { drawable } => handlers::window::get_geometry(state, *drawable),
        Request::QueryTree { window } => handlers::window::query_tree(state, *window),

        Request::InternAtom {
            only_if_exists,
            name,
        } => handlers::atoms_props::intern_atom(state, *only_if_exists, name),
        Request::GetAtomName { atom } => handlers::atoms_props::get_atom_name(state, *atom),
        Request::ChangeProperty {
            mode,
            window,
            property,
            property_type,
            format,
            data,
        } => {
            handlers::atoms_props::change_property(
                state,
                fe,
                *window,
                *mode,
                *property,
                *property_type,
                *format,
                data,
            )
            .await
        }
        Request::DeleteProperty { window, property } => {
            handlers::atoms_props::delete_property(state, *window, *property)
        }
        Request::GetProperty {
            delete,
            window,
            property,
            property_type,
            long_offset,
            long_length,
        } => handlers::atoms_props::get_property(
            state,
            *window,
            *delete,
            *property,
            *property_type,
            *long_offset,
            *long_length,
        ),
        Request::ListProperties { window } => {
            handlers::atoms_props::list_properties(state, *window)
        }
        Request::RotateProperties {
            window,
            delta,
            properties,
        } => handlers::atoms_props::rotate_properties(state, *window, *delta, properties),

        Request::SetSelectionOwner {
            owner,
            selection,
            time,
        } => handlers::selection::set_selection_owner(state, *owner, *selection, *time),
        Request::GetSelectionOwner { selection } => {
            handlers::selection::get_selection_owner(state, *selection)
        }
        Request::ConvertSelection {
            requestor,
            selection,
            target,
            property,
            time,
        } => {
            handlers::selection::convert_selection(
                state, fe, *requestor, *selection, *target, *property, *time,
            )
            .await
        }
        Request::SendEvent {
            propagate,
            destination,
            event_mask,
            event,
        } => handlers::selection::send_event(state, *destination, *propagate, *event_mask, event),

        Request::GrabPointer {
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            time,
        } => handlers::grabs::grab_pointer(
            state,
            client,
            *owner_events,
            *grab_window,
            *event_mask,
            *pointer_mode,
            *keyboard_mode,
            *confine_to,
            *cursor,
            *time,
        ),
        Request::UngrabPointer { time } => {
            handlers::grabs::ungrab_pointer(state, client, *time)
        }
        Request::GrabButton {
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            button,
            modifiers,
        } => handlers::grabs::grab_button(
            state,
            client,
            *owner_events,
            *grab_window,
            *event_mask,
            *pointer_mode,
            *keyboard_mode,
            *confine_to,
            *cursor,
            *button,
            *modifiers,
        ),
        Request::UngrabButton {
            button,
            grab_window,
            modifiers,
        } => handlers::grabs::ungrab_button(state, *grab_window, *button, *modifiers),
        Request::ChangeActivePointerGrab {
            cursor,
            time,
            event_mask,
        } => handlers::grabs::change_active_pointer_grab(
            state,
            client,
            *cursor,
            *time,
            *event_mask,
        ),
        Request::GrabKeyboard {
            owner_events,
            grab_window,
            time,
            pointer_mode,
            keyboard_mode,
        } => handlers::grabs::grab_keyboard(
            state,
            client,
            *owner_events,
            *grab_window,
            *time,
            *pointer_mode,
            *keyboard_mode,
        ),
        Request::UngrabKeyboard { time } => {
            handlers::grabs::ungrab_keyboard(state, client, *time)
        }
        Request::GrabKey {
            owner_events,
            grab_window,
            modifiers,
            key,
            pointer_mode,
            keyboard_mode,
        } => handlers::grabs::grab_key(
            state,
            client,
            *owner_events,
            *grab_window,
            *modifiers,
            *key,
            *pointer_mode,
            *keyboard_mode,
        ),
        Request::UngrabKey {
            key,
            grab_window,
            modifiers,
        } => handlers::grabs::ungrab_key(state, *grab_window, *key, *modifiers),
        Request::AllowEvents { mode, time } => {
            handlers::grabs::allow_events(state, client, *mode, *time)
        }
        Request::GrabServer => handlers::grabs::grab_server(state, client),
        Request::UngrabServer => handlers::grabs::ungrab_server(state, client),

        Request::QueryPointer { window } => handlers::input::query_pointer(state, *window),
        Request::GetMotionEvents {
            window,
            start,
            stop,
        } => handlers::input::get_motion_events(state, *window, *start, *stop),
        Request::TranslateCoordinates {
            src_window,
            dst_window,
            src_x,
            src_y,
        } => handlers::input::translate_coordinates(state, *src_window, *dst_window, *src_x, *src_y),
        Request::WarpPointer {
            src_window,
            dst_window,
            src_x,
            src_y,
            src_width,
            src_height,
            dst_x,
            dst_y,
        } => handlers::input::warp_pointer(
            state,
            *src_window,
            *dst_window,
            *src_x,
            *src_y,
            *src_width,
            *src_height,
            *dst_x,
            *dst_y,
        ),
        Request::SetInputFocus {
            revert_to,
            focus,
            time,
        } => handlers::input::set_input_focus(state, *revert_to, *focus, *time),
        Request::GetInputFocus => handlers::input::get_input_focus(state),
        Request::QueryKeymap => handlers::input::query_keymap(state),

        Request::OpenFont { fid, name } => {
            handlers::font_text::open_font(state, fe, client, *fid, name).await
        }
        Request::CloseFont { font } => handlers::font_text::close_font(state, fe, *font).await,
        Request::QueryFont { font } => handlers::font_text::query_font(state, *font),
        Request::QueryTextExtents { font, string } => {
            handlers::font_text::query_text_extents(state, *font, string)
        }
        Request::ListFonts { max_names, pattern } => {
            handlers::font_text::list_fonts(fe, *max_names, pattern).await
        }
        Request::ListFontsWithInfo { max_names, pattern } => {
            handlers::font_text::list_fonts_with_info(state, fe, client, *max_names, pattern).await
        }
        Request::SetFontPath { paths } => handlers::font_text::set_font_path(paths),
        Request::GetFontPath => handlers::font_text::get_font_path(),
        Request::PolyText8 {
            drawable,
            gc,
            x,
            y,
            items,
        } => handlers::font_text::poly_text8(state, fe, *drawable, *gc, *x, *y, items).await,
        Request::PolyText16 {
            drawable,
            gc,
            x,
            y,
            items,
        } => handlers::font_text::poly_text16(state, fe, *drawable, *gc, *x, *y, items).await,
        Request::ImageText8 {
            drawable,
            gc,
            x,
            y,
            string,
        } => handlers::font_text::image_text8(state, fe, *drawable, *gc, *x, *y, string).await,
        Request::ImageText16 {
            drawable,
            gc,
            x,
            y,
            string,
        } => handlers::font_text::image_text16(state, fe, *drawable, *gc, *x, *y, string).await,

        Request::CreatePixmap {
            depth,
            pid,
            drawable,
            width,
            height,
        } => {
            handlers::drawing::create_pixmap(
                state, fe, client, *depth, *pid, *drawable, *width, *height,
            )
            .await
        }
        Request::FreePixmap { pixmap } => {
            handlers::drawing::free_pixmap(state, fe, *pixmap).await
        }
        Request::CreateGc {
            cid,
            drawable,
            values,
        } => handlers::gc::create_gc(state, fe, client, *cid, *drawable, values).await,
        Request::ChangeGc { gc, values } => {
            handlers::gc::change_gc(state, fe, *gc, values).await
        }
        Request::CopyGc {
            src_gc,
            dst_gc,
            value_mask,
        } => handlers::gc::copy_gc(state, fe, *src_gc, *dst_gc, *value_mask).await,
        Request::SetDashes {
            gc,
            dash_offset,
            dashes,
        } => handlers::gc::set_dashes(state, fe, *gc, *dash_offset, dashes).await,
        Request::SetClipRectangles {
            ordering,
            gc,
            clip_x_origin,
            clip_y_origin,
            rectangles,
        } => {
            handlers::gc::set_clip_rectangles(
                state,
                fe,
                *ordering,
                *gc,
                *clip_x_origin,
                *clip_y_origin,
                rectangles,
            )
            .await
        }
        Request::FreeGc { gc } => handlers::gc::free_gc(state, fe, *gc).await,

        Request::ClearArea {
            exposures,
            window,
            x,
            y,
            width,
            height,
        } => {
            handlers::drawing::clear_area(state, fe, *exposures, *window, *x, *y, *width, *height)
                .await
        }
        Request::CopyArea {
            src_drawable,
            dst_drawable,
            gc,
            src_x,
            src_y,
            dst_x,
            dst_y,
            width,
            height,
        } => {
            handlers::drawing::copy_area(
                state,
                fe,
                *src_drawable,
                *dst_drawable,
                *gc,
                *src_x,
                *src_y,
                *dst_x,
                *dst_y,
                *width,
                *height,
            )
            .await
        }
        Request::CopyPlane {
            src_drawable,
            dst_drawable,
            gc,
            src_x,
            src_y,
            dst_x,
            dst_y,
            width,
            height,
            bit_plane,
        } => {
            handlers::drawing::copy_plane(
                state,
                fe,
                *src_drawable,
                *dst_drawable,
                *gc,
                *src_x,
                *src_y,
                *dst_x,
                *dst_y,
                *width,
                *height,
                *bit_plane,
            )
            .await
        }
        Request::PolyPoint {
            relative,
            drawable,
            gc,
            points,
        } => handlers::drawing::poly_point(state, fe, *relative, *drawable, *gc, points).await,
        Request::PolyLine {
            relative,
            drawable,
            gc,
            points,
        } => handlers::drawing::poly_line(state, fe, *relative, *drawable, *gc, points).await,
        Request::PolySegment {
            drawable,
            gc,
            segments,
        } => handlers::drawing::poly_segment(state, fe, *drawable, *gc, segments).await,
        Request::PolyRectangle {
            drawable,
            gc,
            rectangles,
        } => {
            handlers::drawing::poly_rectangle(state, fe, *drawable, *gc, rectangles, false).await
        }
        Request::PolyFillRectangle {
            drawable,
            gc,
            rectangles,
        } => handlers::drawing::poly_rectangle(state, fe, *drawable, *gc, rectangles, true).await,
        Request::PolyArc { drawable, gc, arcs } => {
            handlers::drawing::poly_arc(state, fe, *drawable, *gc, arcs, false).await
        }
        Request::PolyFillArc { drawable, gc, arcs } => {
            handlers::drawing::poly_arc(state, fe, *drawable, *gc, arcs, true).await
        }
        Request::FillPoly {
            drawable,
            gc,
            shape,
            relative,
            points,
        } => {
            handlers::drawing::fill_poly(state, fe, *drawable, *gc, *shape, *relative, points)
                .await
        }
        Request::PutImage {
            format,
            drawable,
            gc,
            width,
            height,
            dst_x,
            dst_y,
            left_pad,
            depth,
            data,
        } => {
            handlers::drawing::put_image(
                state, fe, *format, *drawable, *gc, *width, *height, *dst_x, *dst_y, *left_pad,
                *depth, data,
            )
            .await
        }
        Request::GetImage {
            format,
            drawable,
            x,
            y,
            width,
            height,
            plane_mask,
        } => {
            handlers::drawing::get_image(
                state,
                fe,
                *format,
                *drawable,
                *x,
                *y,
                *width,
                *height,
                *plane_mask,
            )
            .await
        }
        Request::QueryBestSize {
            class,
            drawable,
            width,
            height,
        } => handlers::drawing::query_best_size(state, *class, *drawable, *width, *height),

        Request::CreateColormap {
            alloc_all,
            mid,
            window,
            visual,
        } => handlers::colormap::create_colormap(state, client, *alloc_all, *mid, *window, *visual),
        Request::FreeColormap { cmap } => handlers::colormap::free_colormap(state, *cmap),
        Request::CopyColormapAndFree { mid, src_cmap } => {
            handlers::colormap::copy_colormap_and_free(state, client, *mid, *src_cmap)
        }
        Request::InstallColormap { cmap } => handlers::colormap::install_colormap(state, *cmap),
        Request::UninstallColormap { cmap } => {
            handlers::colormap::uninstall_colormap(state, *cmap)
        }
        Request::ListInstalledColormaps { window } => {
            handlers::colormap::list_installed_colormaps(state, *window)
        }
        Request::AllocColor {
            cmap,
            red,
            green,
            blue,
        } => handlers::colormap::alloc_color(state, *cmap, *red, *green, *blue),
        Request::AllocNamedColor { cmap, name } => {
            handlers::colormap::alloc_named_color(state, *cmap, name)
        }
        Request::AllocColorCells {
            contiguous,
            cmap,
            colors,
            planes,
        } => handlers::colormap::alloc_color_cells(state, *contiguous, *cmap, *colors, *planes),
        Request::AllocColorPlanes {
            contiguous: _,
            cmap,
            colors,
            reds,
            greens,
            blues,
        } => handlers::colormap::alloc_color_planes(state, *cmap, *colors, *reds, *greens, *blues),
        Request::FreeColors {
            cmap,
            plane_mask,
            pixels,
        } => handlers::colormap::free_colors(state, *cmap, *plane_mask, pixels),
        Request::StoreColors { cmap, items } => {
            handlers::colormap::store_colors(state, *cmap, items)
        }
        Request::StoreNamedColor {
            flags,
            cmap,
            pixel,
            name,
        } => handlers::colormap::store_named_color(state, *flags, *cmap, *pixel, name),
        Request::QueryColors { cmap, pixels } => {
            handlers::colormap::query_colors(state, *cmap, pixels)
        }
        Request::LookupColor { cmap, name } => {
            handlers::colormap::lookup_color(state, *cmap, name)
        }

        Request::CreateCursor {
            cid,
            source,
            mask,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
            x,
            y,
        } => {
            handlers::cursor::create_cursor(
                state,
                fe,
                client,
                *cid,
                *source,
                *mask,
                (*fore_red, *fore_green, *fore_blue),
                (*back_red, *back_green, *back_blue),
                *x,
                *y,
            )
            .await
        }
        Request::CreateGlyphCursor {
            cid,
            source_font,
            mask_font,
            source_char,
            mask_char,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
        } => {
            handlers::cursor::create_glyph_cursor(
                state,
                fe,
                client,
                *cid,
                *source_font,
                *mask_font,
                *source_char,
                *mask_char,
                (*fore_red, *fore_green, *fore_blue),
                (*back_red, *back_green, *back_blue),
            )
            .await
        }
        Request::FreeCursor { cursor } => {
            handlers::cursor::free_cursor(state, fe, *cursor).await
        }
        Request::RecolorCursor {
            cursor,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
        } => {
            handlers::cursor::recolor_cursor(
                state,
                fe,
                *cursor,
                (*fore_red, *fore_green, *fore_blue),
                (*back_red, *back_green, *back_blue),
            )
            .await
        }

        Request::QueryExtension { name } => handlers::misc::query_extension(name),
        Request::ListExtensions => handlers::misc::list_extensions(),
        Request::ChangeKeyboardMapping {
            first_keycode,
            keysyms_per_keycode,
            keysyms,
        } => handlers::input::change_keyboard_mapping(
            state,
            *first_keycode,
            *keysyms_per_keycode,
            keysyms,
        ),
        Request::GetKeyboardMapping {
            first_keycode,
            count,
        } => handlers::input::get_keyboard_mapping(state, *first_keycode, *count),
        Request::ChangeKeyboardControl { values } => {
            handlers::input::change_keyboard_control(state, fe, values).await
        }
        Request::GetKeyboardControl => handlers::input::get_keyboard_control(state),
        Request::Bell { percent } => handlers::input::bell(state, fe, *percent).await,
        Request::ChangePointerControl {
            acceleration_numerator,
            acceleration_denominator,
            threshold,
            do_acceleration,
            do_threshold,
        } => {
            handlers::input::change_pointer_control(
                state,
                fe,
                *acceleration_numerator,
                *acceleration_denominator,
                *threshold,
                *do_acceleration,
                *do_threshold,
            )
            .await
        }
        Request::GetPointerControl => handlers::input::get_pointer_control(state),
        Request::SetScreenSaver {
            timeout,
            interval,
            prefer_blanking,
            allow_exposures,
        } => {
            handlers::input::set_screen_saver(
                state,
                fe,
                *timeout,
                *interval,
                *prefer_blanking,
                *allow_exposures,
            )
            .await
        }
        Request::GetScreenSaver => handlers::input::get_screen_saver(state),
        Request::ForceScreenSaver { activate } => {
            handlers::input::force_screen_saver(fe, *activate).await
        }
        Request::SetPointerMapping { map } => handlers::input::set_pointer_mapping(state, map),
        Request::GetPointerMapping => handlers::input::get_pointer_mapping(state),
        Request::SetModifierMapping {
            keycodes_per_modifier,
            keycodes,
        } => handlers::input::set_modifier_mapping(state, *keycodes_per_modifier, keycodes),
        Request::GetModifierMapping => handlers::input::get_modifier_mapping(state),

        Request::ChangeHosts {
            insert,
            family,
            address,
        } => handlers::misc::change_hosts(*insert, *family, address),
        Request::ListHosts => handlers::misc::list_hosts(),
        Request::SetAccessControl { enabled } => handlers::misc::set_access_control(*enabled),
        Request::SetCloseDownMode { mode } => {
            handlers::misc::set_close_down_mode(state, client, *mode)
        }
        Request::KillClient { resource } => {
            let destroyed = handlers::misc::kill_client(state, *resource)?;
            for window in destroyed {
                fe.destroy_window(window)
                    .await
                    .map_err(|_| XError::implementation())?;
            }
            Ok(None)
        }
        Request::NoOperation => handlers::misc::no_operation(),

        Request::BigReqEnable => handlers::misc::big_req_enable(state, client),
        Request::XInput(req) => handlers::xinput::dispatch(state, client, req),
        Request::Unknown { .. } => Err(XError::request()),
    }
}
